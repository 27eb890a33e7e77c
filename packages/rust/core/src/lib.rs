//! Core pipeline orchestration for AgendaFetch.
//!
//! This crate ties together agenda reading, folder resolution, keyword
//! filtering and output assembly into the end-to-end [`pipeline::Pipeline`].

pub mod assembler;
pub mod filter;
pub mod pipeline;
pub mod resolver;
