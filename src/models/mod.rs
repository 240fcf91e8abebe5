pub mod academic;
pub mod course;
pub mod identity;
pub mod modification;
pub mod planning;
pub mod position;
