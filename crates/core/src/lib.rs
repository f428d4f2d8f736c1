pub mod block;
pub mod block_adapter;
pub mod chain;
pub mod compressor;
pub mod constants;
pub mod delay;
pub mod pitch;
pub mod processor;

pub use block::AudioBlock;
pub use block_adapter::BlockAdapter;
pub use chain::{ChainSettings, EffectChain};
pub use processor::VoiceProcessor;
