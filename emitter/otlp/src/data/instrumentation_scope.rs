use sval_derive::Value;

#[derive(Value)]
pub struct InstrumentationScope<'a, N: ?Sized = str, V: ?Sized = str> {
    #[sval(label = "name", index = 1)]
    pub name: &'a N,
    #[sval(label = "version", index = 2)]
    pub version: &'a V,
}
