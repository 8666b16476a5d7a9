//! Input validation rules shared by every entry point.
//!
//! Each check returns the first violation it finds as
//! [`Error::Validation`], naming the offending field by its wire name.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
  Error, Result,
  diet::{Ingredient, Meal},
};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
    .expect("email pattern is valid")
});

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 12;
pub const DIET_NAME_MIN_LEN: usize = 3;
pub const DIET_NAME_MAX_LEN: usize = 100;

pub fn email(field: &str, value: &str) -> Result<()> {
  if EMAIL.is_match(value) {
    Ok(())
  } else {
    Err(Error::validation(field, "please provide a valid email address"))
  }
}

/// 8 to 12 characters, at least two letters and one character that is
/// neither an ASCII letter nor a digit.
pub fn password(value: &str) -> Result<()> {
  let len = value.chars().count();
  if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
    return Err(Error::validation(
      "password",
      format!(
        "password must be between {PASSWORD_MIN_LEN} and {PASSWORD_MAX_LEN} characters"
      ),
    ));
  }
  if value.chars().filter(|c| c.is_alphabetic()).count() < 2 {
    return Err(Error::validation("password", "password must contain at least 2 letters"));
  }
  if value.chars().all(|c| c.is_ascii_alphanumeric()) {
    return Err(Error::validation(
      "password",
      "password must contain at least 1 special character",
    ));
  }
  Ok(())
}

pub fn age(value: u32) -> Result<()> {
  if value >= 1 {
    Ok(())
  } else {
    Err(Error::validation("age", "age must be at least 1"))
  }
}

pub fn diet_name(value: &str) -> Result<()> {
  let len = value.chars().count();
  if len < DIET_NAME_MIN_LEN {
    return Err(Error::validation(
      "name",
      format!("the diet name must be at least {DIET_NAME_MIN_LEN} characters"),
    ));
  }
  if len > DIET_NAME_MAX_LEN {
    return Err(Error::validation(
      "name",
      format!("the diet name must not exceed {DIET_NAME_MAX_LEN} characters"),
    ));
  }
  Ok(())
}

pub fn duration(value: u32) -> Result<()> {
  if value >= 1 {
    Ok(())
  } else {
    Err(Error::validation("duration_in_days", "the duration must be at least 1 day"))
  }
}

/// A diet needs at least one meal, and every meal at least one ingredient.
pub fn meals(meals: &[Meal]) -> Result<()> {
  if meals.is_empty() {
    return Err(Error::validation("meals", "a diet needs at least one meal"));
  }
  for (i, meal) in meals.iter().enumerate() {
    if meal.name.trim().is_empty() {
      return Err(Error::validation(format!("meals[{i}].name"), "the meal name is required"));
    }
    if meal.ingredients.is_empty() {
      return Err(Error::validation(
        format!("meals[{i}].ingredients"),
        "a meal needs at least one ingredient",
      ));
    }
    for (j, ingredient) in meal.ingredients.iter().enumerate() {
      self::ingredient(&format!("meals[{i}].ingredients[{j}]"), ingredient)?;
    }
  }
  Ok(())
}

fn ingredient(path: &str, ingredient: &Ingredient) -> Result<()> {
  if ingredient.description.trim().is_empty() {
    return Err(Error::validation(
      format!("{path}.description"),
      "the ingredient description is required",
    ));
  }
  if !ingredient.quantity.is_finite() || ingredient.quantity < 0.0 {
    return Err(Error::validation(
      format!("{path}.quantity"),
      "the quantity must be a non-negative number",
    ));
  }
  for (k, substitute) in ingredient.substitutes.iter().enumerate() {
    self::ingredient(&format!("{path}.substitutes[{k}]"), substitute)?;
  }
  Ok(())
}
