macro_rules! register_families {
    (
        $(
            $module:ident
        ),* $(,)?
    ) => {
        // Import all family modules
        $(
            pub mod $module;
        )*

        /// Every family schema, in scrape order.
        pub fn all_schemas() -> Vec<&'static FamilySchema> {
            vec![
                $(&$module::SCHEMA,)*
            ]
        }

        // Generate array of family names - this is what clap needs
        pub const FAMILY_NAMES: &[&str] = &[
            $(stringify!($module),)*
        ];

        /// Filter file sections that map to a family.
        pub fn filter_namespaces() -> Vec<&'static str> {
            vec![
                $($module::SCHEMA.filter_namespace,)*
            ]
        }
    };
}
