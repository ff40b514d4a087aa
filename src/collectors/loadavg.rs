//! Load average collector.

use super::{CollectError, Collection};
use crate::render;

/// System load averages for 1, 5, and 15 minute intervals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadAverage {
    pub one_min: f64,
    pub five_min: f64,
    pub fifteen_min: f64,
}

pub trait LoadAverageSource {
    fn load_average(&self) -> Result<LoadAverage, CollectError>;
}

pub fn collect(source: &dyn LoadAverageSource) -> Result<Collection, CollectError> {
    let load = source.load_average()?;

    let mut collection = Collection::default();
    collection.push(render::load_average(
        load.one_min,
        load.five_min,
        load.fifteen_min,
    ));
    Ok(collection)
}
