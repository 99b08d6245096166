pub mod binary;
pub mod text;
