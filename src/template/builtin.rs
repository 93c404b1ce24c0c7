//! Templates compiled into the binary

/// Built-in templates as (name, source) pairs
pub const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        "common/boilerplate",
        include_str!("../../templates/common/boilerplate.mustache"),
    ),
    (
        "file/version",
        include_str!("../../templates/file/version.mustache"),
    ),
    ("file/lang", include_str!("../../templates/file/lang.mustache")),
    (
        "file/readme",
        include_str!("../../templates/file/readme.mustache"),
    ),
    ("file/php", include_str!("../../templates/file/php.mustache")),
];
