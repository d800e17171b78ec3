mod loader;
mod locator;
mod normalize;
mod pipeline;
mod run;

pub use run::run;
