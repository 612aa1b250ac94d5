//! Utility functions for the composer

pub mod string;
