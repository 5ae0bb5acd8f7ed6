pub mod consumer;
pub mod dispatcher;
pub mod errors;
pub mod messages;

pub use consumer::KafkaRequestConsumer;
pub use dispatcher::MessageDispatcher;
pub use dispatcher::Reply;
pub use errors::MessageProcessingError;
