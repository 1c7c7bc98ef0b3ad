//! PDF 页面来源 - 基础设施层
//!
//! 唯一持有解析后 PDF 对象的地方，只暴露"按页取文本"的能力。
//! 解析库在畸形输入上可能 panic，所有调用都包在 `catch_unwind` 里转成错误。

use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use crate::error::ExtractionError;

const PDF_MAGIC: &[u8] = b"%PDF";

/// 按页读取文本的能力
///
/// 提取服务只依赖这个 trait，测试里可以直接用内存页面替代真实 PDF。
pub trait PageSource {
    /// 文档声明的总页数
    fn page_count(&self) -> usize;

    /// 是否加密
    fn is_encrypted(&self) -> bool;

    /// 第 `index` 页（从 0 开始）的原始文本
    fn page_text(&self, index: usize) -> Result<String, ExtractionError>;
}

/// 基于 lopdf 的 PDF 来源
pub struct PdfSource {
    document: lopdf::Document,
    page_numbers: Vec<u32>,
}

impl PdfSource {
    /// 从内存加载 PDF
    pub fn load(bytes: &[u8]) -> Result<Self, ExtractionError> {
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(ExtractionError::Corrupted {
                reason: "missing %PDF header".to_string(),
            });
        }

        let loaded = panic::catch_unwind(AssertUnwindSafe(|| lopdf::Document::load_mem(bytes)));

        let document = match loaded {
            Ok(Ok(document)) => document,
            Ok(Err(e)) => {
                // 解析失败时，带加密字典的文件按加密处理，提示更具体
                if has_encrypt_dictionary(bytes) {
                    return Err(ExtractionError::Protected);
                }
                return Err(ExtractionError::Corrupted {
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(ExtractionError::Corrupted {
                    reason: "PDF parser panicked (malformed document)".to_string(),
                })
            }
        };

        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        debug!("PDF 加载完成，共 {} 页", page_numbers.len());

        Ok(Self {
            document,
            page_numbers,
        })
    }
}

impl PageSource for PdfSource {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn is_encrypted(&self) -> bool {
        self.document.is_encrypted()
    }

    fn page_text(&self, index: usize) -> Result<String, ExtractionError> {
        let page_number = *self
            .page_numbers
            .get(index)
            .ok_or_else(|| ExtractionError::Corrupted {
                reason: format!("page {} does not exist", index + 1),
            })?;

        let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
            self.document.extract_text(&[page_number])
        }));

        match extracted {
            Ok(Ok(text)) => Ok(text),
            // 单页内容流无法解码时按空白页处理，交给扫描件检测判断
            Ok(Err(e)) => {
                debug!("第 {} 页文本解码失败: {}", page_number, e);
                Ok(String::new())
            }
            Err(_) => Err(ExtractionError::Corrupted {
                reason: format!("PDF parser panicked on page {}", page_number),
            }),
        }
    }
}

fn has_encrypt_dictionary(bytes: &[u8]) -> bool {
    bytes.windows(b"/Encrypt".len()).any(|w| w == b"/Encrypt")
}

/// 内存中的页面来源
#[derive(Debug, Clone, Default)]
pub struct MemoryPages {
    pub pages: Vec<String>,
    pub encrypted: bool,
}

impl MemoryPages {
    pub fn new<S: Into<String>>(pages: impl IntoIterator<Item = S>) -> Self {
        Self {
            pages: pages.into_iter().map(Into::into).collect(),
            encrypted: false,
        }
    }

    pub fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }
}

impl PageSource for MemoryPages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    fn page_text(&self, index: usize) -> Result<String, ExtractionError> {
        self.pages
            .get(index)
            .cloned()
            .ok_or_else(|| ExtractionError::Corrupted {
                reason: format!("page {} does not exist", index + 1),
            })
    }
}

/// 根据扩展名猜测 MIME 类型
pub fn guess_mime_type(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}
