pub mod book;
pub mod reservation;
pub mod student;
