// src/services/mod.rs
//
// Business rules shared by the handlers. Everything here talks to the
// store and the media adapter through their traits only.

pub mod accounts;
pub mod membership;
pub mod projects;
pub mod yearbooks;
