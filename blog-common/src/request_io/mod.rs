pub mod inputs;
pub mod outputs;
