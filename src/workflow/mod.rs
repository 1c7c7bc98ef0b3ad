pub mod ingest_flow;
pub mod scoring;
pub mod session;

pub use ingest_flow::IngestFlow;
pub use session::{QuizTicket, Session, SessionState, Stage, SummaryTicket, Ticket};
