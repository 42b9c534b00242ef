//! Access policy for the HTTP surface.

pub mod access;
