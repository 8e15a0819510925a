// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Stateless calculator endpoints

use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::metrics::{self, Gender};

#[derive(Debug, Deserialize)]
pub struct BmiRequest {
    pub height: f64,
    pub weight: f64,
}

#[derive(Debug, Serialize)]
pub struct BmiResponse {
    pub bmi: f64,
}

#[derive(Debug, Deserialize)]
pub struct CaloricNeedsRequest {
    pub age: u32,
    pub height: f64,
    pub weight: f64,
    pub gender: String,
    pub trainings_per_week: u32,
}

#[derive(Debug, Serialize)]
pub struct CaloricNeedsResponse {
    pub daily_caloric_needs: i64,
}

pub fn bmi(request: BmiRequest) -> Result<BmiResponse, ApiError> {
    Ok(BmiResponse {
        bmi: metrics::bmi(request.height, request.weight)?,
    })
}

pub fn daily_caloric_needs(request: CaloricNeedsRequest) -> Result<CaloricNeedsResponse, ApiError> {
    let gender = request.gender.parse::<Gender>()?;
    let daily_caloric_needs = metrics::daily_caloric_needs(
        request.age,
        request.height,
        request.weight,
        gender,
        request.trainings_per_week,
    )?;

    Ok(CaloricNeedsResponse { daily_caloric_needs })
}
