pub mod body;
pub mod note;
