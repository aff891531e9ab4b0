#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

#[macro_export]
macro_rules! extraction_rule {
    (
        name: $name:expr,
        tag: $tag:expr,
        pattern: [ $($element:expr),* $(,)? ]
        $(, semantics: [ $($definition:expr),* $(,)? ])?
        $(, filters: [ $($filter:expr),* $(,)? ])?
        $(, negatives: [ $($negative:expr),* $(,)? ])?
        $(, standalone: $standalone:expr)?
        $(,)?
    ) => {{
        $crate::rules::ExtractionRule {
            name: $name.to_string(),
            tag: $tag.to_string(),
            elements: vec![ $($element),* ],
            definitions: vec![ $($($definition),*)? ],
            filters: vec![ $($($filter),*)? ],
            negatives: vec![ $($($negative),*)? ],
            standalone: { true $(&& $standalone)? },
        }
    }};
}
