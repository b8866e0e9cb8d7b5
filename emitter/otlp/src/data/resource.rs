use sval_derive::Value;

use super::Attributes;

#[derive(Value)]
pub struct Resource<'a, A: ?Sized = Attributes<'a>> {
    #[sval(label = "attributes", index = 1)]
    pub attributes: &'a A,
}
