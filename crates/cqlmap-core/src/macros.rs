// udt_field_value
/// Implement `FieldValue` for a mapped user-defined type so it can be used
/// as a field type, directly or inside collections.
#[macro_export]
macro_rules! udt_field_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::types::FieldValue for $ty {
                fn data_type() -> $crate::types::DataType {
                    $crate::types::DataType::Udt($crate::declare::TypeRef::of::<Self>())
                }

                fn to_value(
                    &self,
                ) -> ::std::result::Result<$crate::value::Value, $crate::error::ValueError> {
                    $crate::pipeline::udt_to_value(self)
                }

                fn from_value(
                    value: $crate::value::Value,
                ) -> ::std::result::Result<Self, $crate::error::ValueError> {
                    $crate::pipeline::udt_from_value(value)
                }
            }
        )+
    };
}

// register_entity
/// Submit mapped types to the registry scanned by schema planning.
#[macro_export]
macro_rules! register_entity {
    ($($ty:ty),+ $(,)?) => {
        $(
            $crate::inventory::submit! {
                $crate::schema::EntityRegistration::new(
                    module_path!(),
                    $crate::declare::TypeRef::of::<$ty>,
                )
            }
        )+
    };
}
