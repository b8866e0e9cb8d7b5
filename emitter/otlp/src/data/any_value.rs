use sval_derive::Value;

use super::Attribute;

const ANY_VALUE_STRING_LABEL: sval::Label =
    sval::Label::new("stringValue").with_tag(&sval::tags::VALUE_IDENT);

const ANY_VALUE_STRING_INDEX: sval::Index = sval::Index::new(1);

#[derive(Value)]
pub enum AnyValue<'a, SV: ?Sized = str> {
    #[sval(label = ANY_VALUE_STRING_LABEL, index = ANY_VALUE_STRING_INDEX)]
    String(&'a SV),
}

const KEY_VALUE_KEY_LABEL: sval::Label = sval::Label::new("key").with_tag(&sval::tags::VALUE_IDENT);
const KEY_VALUE_VALUE_LABEL: sval::Label =
    sval::Label::new("value").with_tag(&sval::tags::VALUE_IDENT);

const KEY_VALUE_KEY_INDEX: sval::Index = sval::Index::new(1);
const KEY_VALUE_VALUE_INDEX: sval::Index = sval::Index::new(2);

#[derive(Value)]
pub struct KeyValue<K, V> {
    #[sval(label = KEY_VALUE_KEY_LABEL, index = KEY_VALUE_KEY_INDEX)]
    pub key: K,
    #[sval(label = KEY_VALUE_VALUE_LABEL, index = KEY_VALUE_VALUE_INDEX)]
    pub value: V,
}

/**
A list of string-valued attributes, streamed as `KeyValue`s.
*/
pub struct Attributes<'a>(pub &'a [Attribute]);

impl<'a> sval::Value for Attributes<'a> {
    fn stream<'sval, S: sval::Stream<'sval> + ?Sized>(&'sval self, stream: &mut S) -> sval::Result {
        stream.seq_begin(Some(self.0.len()))?;

        for attribute in self.0 {
            stream.seq_value_begin()?;
            stream.value_computed(&KeyValue {
                key: &*attribute.key,
                value: AnyValue::String(&*attribute.value),
            })?;
            stream.seq_value_end()?;
        }

        stream.seq_end()
    }
}
