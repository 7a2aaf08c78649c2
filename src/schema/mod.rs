pub mod character;
pub mod relation;
pub mod template;
