// Concrete discovery sources and the web APIs behind them.

pub mod indeed;
pub mod linkedin;
pub mod tavily;
