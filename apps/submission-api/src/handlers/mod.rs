pub mod auth;
pub mod files;
pub mod health;
pub mod objects;
pub mod publish;
pub mod rems;
pub mod schemas;
pub mod submissions;
pub mod workflows;
