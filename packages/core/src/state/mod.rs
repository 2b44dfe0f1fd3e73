// Состояние клиента переговоров

pub mod conversations;
pub mod flow;
pub mod messages;
pub mod session;

pub use conversations::{ConversationDirectory, PeerGroup, RecencyBucket, RecencyGroup};
pub use flow::{derive_flow_state, FlowState, NegotiationPhase, NegotiationStatus, Perspective, TermsConfirmation};
pub use messages::MessageStore;
pub use session::{ContractDraft, NegotiationSession, Notice, NoticeLevel};
