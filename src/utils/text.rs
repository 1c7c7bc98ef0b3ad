/// 文本工具

/// 按空白切分计数
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// 非空白字符数
pub fn count_visible_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// 每个词在原文中的字节区间 `[start, end)`
///
/// 截断时按区间切片原文，保证保留部分与原文逐字节一致。
pub fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push((s, idx));
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }

    spans
}

/// 清理单页文本：去掉行尾空白，连续空行最多保留两行
pub fn clean_page(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0_u32;

    for line in raw.lines().map(str::trim_end) {
        if line.is_empty() {
            blank_run += 1;
            if blank_run <= 2 {
                out.push('\n');
            }
        } else {
            blank_run = 0;
            out.push_str(line);
            out.push('\n');
        }
    }

    out.trim_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_spans_match_split_whitespace() {
        let text = "  alpha beta\n\ngamma\t delta ";
        let spans = word_spans(text);
        let words: Vec<&str> = spans.iter().map(|&(s, e)| &text[s..e]).collect();
        assert_eq!(words, text.split_whitespace().collect::<Vec<_>>());
    }

    #[test]
    fn test_word_spans_multibyte() {
        let text = "héllo wörld 文档";
        let spans = word_spans(text);
        assert_eq!(spans.len(), 3);
        assert_eq!(&text[spans[2].0..spans[2].1], "文档");
    }

    #[test]
    fn test_clean_page() {
        assert_eq!(clean_page("a  \n\n\n\n\nb\n"), "a\n\n\nb");
        assert_eq!(clean_page("\n\n\nhello\n\n"), "hello");
        assert_eq!(clean_page("   \n \n"), "");
    }

    #[test]
    fn test_count_visible_chars() {
        assert_eq!(count_visible_chars(" a b\n c "), 3);
        assert_eq!(count_words(""), 0);
    }
}
