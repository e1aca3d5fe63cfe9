pub mod action;
pub mod action_parser;
pub mod entities;
pub mod goal;
pub mod observation;
pub mod outcome;
pub mod transcript;
