//! Settable terminal locations inside a destination.
//!
//! A leaf is one field seen through a type-erased [`LeafSlot`]. The derive
//! pairs each field with an [`Assign`] wrapper matching its declared shape
//! (`T`, `Option<T>`, `Vec<T>`, `Vec<Option<T>>`, `Option<Vec<T>>`) and the
//! conversion strategy chosen for the innermost type.

use tracing::trace;

use crate::coerce::{CoerceError, ElementStrategy, FieldStrategy};
use crate::multipart::FileHeader;

/// Signature of a file-part writer for a field of type `F`.
pub type FilesFn<F> = fn(&mut F, &[FileHeader]) -> Result<bool, CoerceError>;

/// Applies raw values onto a field of type `F`.
pub trait Assign<F> {
    /// Writes `values` into `target`.
    fn assign(&self, target: &mut F, values: &[String]) -> Result<(), CoerceError>;
}

/// Plain value: the strategy writes in place.
#[derive(Debug, Clone, Copy)]
pub struct Value<S>(pub S);

/// Optional value: allocated only once conversion succeeds; an existing
/// value is updated in place.
#[derive(Debug, Clone, Copy)]
pub struct Optional<S>(pub S);

/// Sequence: every raw value becomes one element; the sequence is replaced
/// once all elements converted.
#[derive(Debug, Clone, Copy)]
pub struct Seq<S>(pub S);

/// Sequence of optional elements.
#[derive(Debug, Clone, Copy)]
pub struct SeqOfOptional<S>(pub S);

/// Optional sequence: an existing sequence keeps its allocation and has its
/// contents replaced.
#[derive(Debug, Clone, Copy)]
pub struct OptionalSeq<S>(pub S);

impl<T, S: FieldStrategy<T>> Assign<T> for Value<S> {
    fn assign(&self, target: &mut T, values: &[String]) -> Result<(), CoerceError> {
        self.0.assign(target, values)
    }
}

impl<T, S: FieldStrategy<T>> Assign<Option<T>> for Optional<S> {
    fn assign(&self, target: &mut Option<T>, values: &[String]) -> Result<(), CoerceError> {
        match target {
            Some(existing) => self.0.assign(existing, values),
            None => {
                *target = Some(self.0.fresh(values)?);
                Ok(())
            }
        }
    }
}

fn elements<T, S: ElementStrategy<T>>(strategy: &S, values: &[String]) -> Result<Vec<T>, CoerceError> {
    values.iter().map(|v| strategy.element(v)).collect()
}

impl<T, S: ElementStrategy<T>> Assign<Vec<T>> for Seq<S> {
    fn assign(&self, target: &mut Vec<T>, values: &[String]) -> Result<(), CoerceError> {
        *target = elements(&self.0, values)?;
        Ok(())
    }
}

impl<T, S: ElementStrategy<T>> Assign<Vec<Option<T>>> for SeqOfOptional<S> {
    fn assign(&self, target: &mut Vec<Option<T>>, values: &[String]) -> Result<(), CoerceError> {
        *target = elements(&self.0, values)?.into_iter().map(Some).collect();
        Ok(())
    }
}

impl<T, S: ElementStrategy<T>> Assign<Option<Vec<T>>> for OptionalSeq<S> {
    fn assign(&self, target: &mut Option<Vec<T>>, values: &[String]) -> Result<(), CoerceError> {
        let fresh = elements(&self.0, values)?;
        match target {
            Some(existing) => {
                existing.clear();
                existing.extend(fresh);
            }
            None => *target = Some(fresh),
        }
        Ok(())
    }
}

/// Field types that can receive uploaded file parts.
pub trait FileTarget {
    /// Stores `files` (the parts sent under this field's key).
    ///
    /// Returns `Ok(true)` when something was written.
    fn assign_files(&mut self, files: &[FileHeader]) -> Result<bool, CoerceError>;
}

impl FileTarget for FileHeader {
    fn assign_files(&mut self, _files: &[FileHeader]) -> Result<bool, CoerceError> {
        Err(CoerceError::FileByValue)
    }
}

impl FileTarget for Option<FileHeader> {
    fn assign_files(&mut self, files: &[FileHeader]) -> Result<bool, CoerceError> {
        match files.first() {
            Some(file) => {
                *self = Some(file.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl FileTarget for Vec<FileHeader> {
    fn assign_files(&mut self, files: &[FileHeader]) -> Result<bool, CoerceError> {
        if files.is_empty() {
            return Ok(false);
        }
        *self = files.to_vec();
        Ok(true)
    }
}

impl FileTarget for Vec<Option<FileHeader>> {
    fn assign_files(&mut self, files: &[FileHeader]) -> Result<bool, CoerceError> {
        if files.is_empty() {
            return Ok(false);
        }
        *self = files.iter().cloned().map(Some).collect();
        Ok(true)
    }
}

/// Type-erased view of one settable field.
pub trait LeafSlot {
    /// Writes raw string values.
    fn assign(&mut self, values: &[String]) -> Result<(), CoerceError>;

    /// Whether the field can hold uploaded files.
    fn accepts_files(&self) -> bool;

    /// Writes uploaded file parts. Returns `Ok(false)` for non-file fields
    /// or when `files` is empty.
    fn assign_files(&mut self, files: &[FileHeader]) -> Result<bool, CoerceError>;
}

/// A field borrowed together with its writers.
pub struct Leaf<'a, F, A> {
    target: &'a mut F,
    assign: A,
    files: Option<FilesFn<F>>,
}

impl<'a, F, A> Leaf<'a, F, A> {
    /// Borrows `target` for writing.
    pub fn new(target: &'a mut F, assign: A, files: Option<FilesFn<F>>) -> Self {
        Self {
            target,
            assign,
            files,
        }
    }
}

impl<F, A: Assign<F>> LeafSlot for Leaf<'_, F, A> {
    fn assign(&mut self, values: &[String]) -> Result<(), CoerceError> {
        trace!(
            field_type = std::any::type_name::<F>(),
            values = values.len(),
            "assigning leaf"
        );
        self.assign.assign(&mut *self.target, values)
    }

    fn accepts_files(&self) -> bool {
        self.files.is_some()
    }

    fn assign_files(&mut self, files: &[FileHeader]) -> Result<bool, CoerceError> {
        match self.files {
            Some(write) => write(&mut *self.target, files),
            None => Ok(false),
        }
    }
}
