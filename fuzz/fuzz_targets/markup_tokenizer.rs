#![no_main]

use libfuzzer_sys::fuzz_target;
use markup::{Token, Tokenizer, TokenizerConfig, tokenize};
use std::convert::Infallible;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let (whole, _) = tokenize(input);

    // Feeding the same input in small chunks must produce the same tokens.
    let mut tokenizer: Tokenizer<Infallible> = Tokenizer::new(TokenizerConfig::default());
    let mut chunked: Vec<Token<Infallible>> = Vec::new();
    let mut rest = input;
    while !rest.is_empty() {
        let mut split = rest.len().min(7);
        while !rest.is_char_boundary(split) {
            split += 1;
        }
        let (chunk, tail) = rest.split_at(split);
        tokenizer.push_str(chunk);
        chunked.extend(tokenizer.take_tokens());
        rest = tail;
    }
    chunked.extend(tokenizer.finish());
    assert_eq!(whole, chunked);
});
