//! Causal
//!
//! Targeted minimum-loss estimation of the interventional disparity indirect
//! effect among the exposed: the change in outcome risk of the exposed if
//! their mediator followed the distribution it has among comparable unexposed
//! individuals.
//!
//! The pipeline runs nuisance fitting ([`nuisance`]), counterfactual
//! expansion ([`counterfactual`]), initial estimation ([`influence`]),
//! targeting ([`targeting`]) and reporting ([`result`]) in that order.
pub mod config;
pub mod counterfactual;
pub mod fluctuation;
pub mod idie;
pub mod influence;
pub mod nuisance;
pub mod result;
pub mod setters;
pub mod targeting;
