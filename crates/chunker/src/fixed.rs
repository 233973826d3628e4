/// Slide a `size`-wide window over the text, advancing by `stride` code points.
///
/// Windows are kept verbatim so that dropping the first `size - stride` code points of
/// every window after the first reconstructs the input. The final partial window is
/// included when nonempty. `stride` must be positive.
pub(crate) fn split_fixed(text: &str, size: usize, stride: usize) -> Vec<String> {
    debug_assert!(stride > 0, "fixed chunking needs a positive stride");

    let chars: Vec<char> = text.chars().collect();
    let mut windows = Vec::with_capacity(chars.len() / stride.max(1) + 1);
    let mut start = 0;

    while start < chars.len() {
        let end = (start + size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end >= chars.len() {
            break;
        }
        start += stride;
    }

    windows
}
