//! Client state models.
//!
//! SYSTEM CONTEXT
//! ==============
//! `board` is the sync reducer for the joined session; `gesture` is the local
//! interaction state machine whose commits become session requests;
//! `pending` holds sent requests until the session answers them.

pub mod board;
pub mod gesture;
pub mod pending;
