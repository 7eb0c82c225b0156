pub mod contact;
pub mod turn;
