//! # Quant
//!
//! $$
//! \text{basket}\ \mapsto\ (\mathbf w^\*,\ \rho,\ \hat\sigma_{T+h})
//! $$
//!
//! Portfolio construction and volatility modelling for a basket of instruments.

pub mod portfolio;
pub mod volatility;
