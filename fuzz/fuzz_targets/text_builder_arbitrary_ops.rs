#![no_main]

use derivekit::ds::TextBuilder;
use libfuzzer_sys::fuzz_target;

// Fuzz arbitrary append sequences on a small TextBuilder.
//
// The buffer must mirror a String built from the accepted appends; rejected
// appends must leave it untouched.
fuzz_target!(|data: &[u8]| {
    let mut text: TextBuilder<32> = TextBuilder::new();
    let mut model = String::new();

    for chunk in data.chunks(3) {
        let op = chunk[0] % 4;
        let arg = chunk.get(1).copied().unwrap_or(0);

        let before = text.len();
        let accepted = match op {
            0 => {
                let piece = "ab\u{e9}\u{4e2d}";
                let end = piece
                    .char_indices()
                    .map(|(i, _)| i)
                    .nth(usize::from(arg) % 4)
                    .unwrap_or(piece.len());
                let piece = &piece[..end];
                text.append_str(piece).ok().map(|()| piece.to_string())
            },
            1 => {
                let ch = char::from_u32(u32::from(arg) * 131).unwrap_or('?');
                text.append_char(ch).ok().map(|()| ch.to_string())
            },
            2 => text.append_fmt(&arg).ok().map(|()| arg.to_string()),
            _ => {
                text.clear();
                model.clear();
                assert!(text.is_empty());
                continue;
            },
        };

        match accepted {
            Some(piece) => model.push_str(&piece),
            None => assert_eq!(text.len(), before),
        }
        assert_eq!(text.as_str(), model);
        assert_eq!(text.len() + text.remaining_capacity(), text.capacity());
    }
});
