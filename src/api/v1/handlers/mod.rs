pub mod canvas;
pub mod health;
