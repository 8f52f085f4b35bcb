pub mod pinecone;
pub mod record;
pub mod traits;

pub use pinecone::PineconeIndex;
pub use record::{record_id, IndexRecord, RecordMetadata};
pub use traits::{IndexError, VectorIndex};
