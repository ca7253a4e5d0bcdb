pub mod catalog;
pub mod conversation;
pub mod customer;
pub mod inventory;
pub mod loyalty;
pub mod order;
pub mod payment;
pub mod support;
