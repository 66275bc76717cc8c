//! Robots exclusion handling
//!
//! This module provides robots.txt evaluation, robots meta tag parsing and the
//! access gate that combines both.

mod directive;
mod meta;
mod rules;

pub use directive::{AccessDecision, AccessReason, PrimeDirective};
pub use meta::MetaDirectives;
pub use rules::RobotsRules;
