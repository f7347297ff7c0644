pub mod alternatives;
pub mod augmenter;
pub mod equality;
pub mod filter;
pub mod learner;
pub mod sampler;
pub mod session;
pub mod state;
pub mod types;
