/// Renders a slice of Display items, for debug logging.
pub fn vec_to_str<T>(v: &[T]) -> String
where
    T: std::fmt::Display,
{
    v.iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
