const PARAGRAPH_BREAK: &str = "\n\n";

/// Split on paragraphs, then sentences for oversized paragraphs, and pack the pieces
/// greedily until the next one would push the chunk past `size` code points. When a
/// chunk is emitted, its last `overlap_words` words seed the next one.
pub(crate) fn split_recursive(text: &str, size: usize, overlap_words: usize) -> Vec<String> {
    let mut packer = Packer::new(size, overlap_words);

    for paragraph in text.split(PARAGRAPH_BREAK) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        if char_len(paragraph) > size {
            for sentence in split_sentences(paragraph) {
                packer.push(&sentence, " ");
            }
        } else {
            packer.push(paragraph, PARAGRAPH_BREAK);
        }
    }

    packer.finish()
}

/// Sentences end at `.`, `!` or `?` followed by whitespace. The terminator stays with
/// its sentence.
pub(crate) fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        let terminal = matches!(ch, '.' | '!' | '?');
        if terminal && chars.peek().is_some_and(|next| next.is_whitespace()) {
            push_trimmed(&mut sentences, &current);
            current.clear();
        }
    }
    push_trimmed(&mut sentences, &current);

    sentences
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

struct Packer {
    size: usize,
    overlap_words: usize,
    current: String,
    current_len: usize,
    chunks: Vec<String>,
}

impl Packer {
    const fn new(size: usize, overlap_words: usize) -> Self {
        Self {
            size,
            overlap_words,
            current: String::new(),
            current_len: 0,
            chunks: Vec::new(),
        }
    }

    fn push(&mut self, unit: &str, separator: &str) {
        let unit_len = char_len(unit);
        if self.current_len + unit_len > self.size && !self.current.trim().is_empty() {
            self.emit();
        }
        self.append(unit);
        self.append(separator);
    }

    fn append(&mut self, text: &str) {
        self.current.push_str(text);
        self.current_len += char_len(text);
    }

    fn emit(&mut self) {
        let finished = std::mem::take(&mut self.current);
        self.current_len = 0;
        push_trimmed(&mut self.chunks, &finished);

        let words: Vec<&str> = finished.split_whitespace().collect();
        let keep = self.overlap_words.min(words.len());
        if keep > 0 {
            let tail = words[words.len() - keep..].join(" ");
            self.append(&tail);
            self.append(" ");
        }
    }

    fn finish(mut self) -> Vec<String> {
        push_trimmed(&mut self.chunks, &self.current);
        self.chunks
    }
}
