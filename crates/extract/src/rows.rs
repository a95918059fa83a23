use billsieve_core::{Line, Word};

/// Groups recognized words into lines.
///
/// Words with text but a known confidence below `min_confidence` are dropped;
/// unscored words (`-1`) are kept. The rest are sorted by `(top, left)` and a
/// new line starts whenever a word sits more than `tolerance` away from the
/// `top` of the current line's first word.
pub fn build_lines(words: &[Word], min_confidence: i32, tolerance: i32) -> Vec<Line> {
    let mut kept: Vec<Word> = words
        .iter()
        .filter(|w| !w.text.trim().is_empty())
        .filter(|w| !w.has_known_confidence() || w.confidence >= min_confidence)
        .map(|w| Word {
            text: w.text.trim().to_string(),
            ..w.clone()
        })
        .collect();

    if kept.is_empty() {
        return vec![];
    }

    kept.sort_by_key(|w| (w.top, w.left));

    let mut groups: Vec<Vec<Word>> = Vec::new();
    let mut anchor_top = kept[0].top;
    let mut current: Vec<Word> = Vec::new();

    for word in kept {
        if !current.is_empty() && (word.top - anchor_top).abs() > tolerance {
            groups.push(std::mem::take(&mut current));
        }
        if current.is_empty() {
            anchor_top = word.top;
        }
        current.push(word);
    }
    groups.push(current);

    groups.into_iter().map(finish_line).collect()
}

fn finish_line(mut words: Vec<Word>) -> Line {
    words.sort_by_key(|w| w.left);

    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let scored: Vec<i64> = words
        .iter()
        .filter(|w| w.has_known_confidence())
        .map(|w| i64::from(w.confidence))
        .collect();
    let avg_confidence = if scored.is_empty() {
        -1
    } else {
        (scored.iter().sum::<i64>() / scored.len() as i64) as i32
    };

    let min_left = words.iter().map(|w| w.left).min().unwrap_or(0);
    let max_right = words.iter().map(|w| w.right).max().unwrap_or(0);

    Line {
        text,
        avg_confidence,
        min_left,
        max_right,
        words,
    }
}
