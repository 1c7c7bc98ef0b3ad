pub mod pdf_source;

pub use pdf_source::{guess_mime_type, MemoryPages, PageSource, PdfSource};
