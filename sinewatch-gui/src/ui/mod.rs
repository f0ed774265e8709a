//! # UI Module
//!
//! This module contains all UI components for the Sinewatch application.

pub mod main_display;
pub mod spectrum;
pub mod track_list;
