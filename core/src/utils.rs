use std::any::Any;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use num_enum::TryFromPrimitive;

/// `Debug` name of the variant, or the raw value if the code is unknown.
pub fn enum_name_or_code<T>(raw: T::Primitive) -> String
where
    T: TryFromPrimitive + fmt::Debug,
    T::Primitive: fmt::Display,
{
    match T::try_from_primitive(raw) {
        Ok(variant) => format!("{:?}", variant),
        Err(_) => format!("{}", raw),
    }
}

/// Best-effort text of a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Lock ignoring poison. Every critical section in this crate leaves its
/// state consistent before anything that can panic runs.
pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
