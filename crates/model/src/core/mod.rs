pub mod data_type;
pub mod document;
pub mod object_id;
pub mod value;
