use std::io::{BufRead, Write};

use unify_ox_common::ChatMessage;

use crate::{Client, GenerateParams, Generation, Unify, UnifyError};

/// Terminal-style chat loop over a blocking [`Unify`] client.
///
/// The conversation lives in the client's default `messages`. Typing `quit`
/// ends the session and clears it; `pause` ends the session and keeps it.
#[derive(Debug)]
pub struct ChatBot {
    client: Unify,
    paused: bool,
}

impl ChatBot {
    pub fn new(client: Unify) -> Result<Self, UnifyError> {
        if !client.defaults().content_only() {
            return Err(UnifyError::usage(
                "ChatBot requires message_content_only and no tools",
            ));
        }
        Ok(Self {
            client,
            paused: false,
        })
    }

    pub fn client(&self) -> &Unify {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut Unify {
        &mut self.client
    }

    pub fn into_client(self) -> Unify {
        self.client
    }

    pub fn clear_chat_history(&mut self) {
        self.client.defaults_mut().messages = Some(Vec::new());
    }

    /// Run until the input says `quit` or `pause`, or ends.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        output: &mut W,
        show_credits: bool,
        show_provider: bool,
    ) -> Result<(), UnifyError> {
        if self.paused {
            writeln!(
                output,
                "Welcome back! (Remember, enter `pause` to pause and `quit` to exit)"
            )?;
        } else {
            writeln!(
                output,
                "Let's have a chat. (Enter `pause` to pause and `quit` to exit)"
            )?;
            self.clear_chat_history();
        }
        self.paused = false;

        let mut line = String::new();
        loop {
            write!(output, "> ")?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                self.clear_chat_history();
                return Ok(());
            }
            match line.trim() {
                "quit" => {
                    self.clear_chat_history();
                    return Ok(());
                }
                "pause" => {
                    self.paused = true;
                    return Ok(());
                }
                "" => continue,
                prompt => self.turn(prompt, output, show_credits, show_provider)?,
            }
        }
    }

    fn turn<W: Write>(
        &mut self,
        prompt: &str,
        output: &mut W,
        show_credits: bool,
        show_provider: bool,
    ) -> Result<(), UnifyError> {
        let credits_before = if show_credits {
            Some(self.client.get_credit_balance()?)
        } else {
            None
        };

        self.client
            .defaults_mut()
            .messages
            .get_or_insert_with(Vec::new)
            .push(ChatMessage::user(prompt));

        let reply = match self.reply(output) {
            Ok(reply) => reply,
            Err(err) => {
                if let Some(messages) = self.client.defaults_mut().messages.as_mut() {
                    messages.pop();
                }
                return Err(err);
            }
        };
        writeln!(output)?;

        self.client
            .defaults_mut()
            .messages
            .get_or_insert_with(Vec::new)
            .push(ChatMessage::assistant(reply));

        if let Some(before) = credits_before {
            let spent = before - self.client.get_credit_balance()?;
            writeln!(output, "(spent {spent:.6} credits)")?;
        }
        if show_provider {
            writeln!(output, "(provider: {})", self.client.provider().unwrap_or("unknown"))?;
        }
        Ok(())
    }

    /// Generate over the current history and echo the reply as it arrives.
    fn reply<W: Write>(&mut self, output: &mut W) -> Result<String, UnifyError> {
        let reply = match self.client.generate(None, GenerateParams::default())? {
            Generation::Text(text) => {
                write!(output, "{text}")?;
                text
            }
            Generation::Stream(stream) => {
                let mut reply = String::new();
                for item in stream {
                    if let Some(fragment) = item?.text() {
                        write!(output, "{fragment}")?;
                        output.flush()?;
                        reply.push_str(fragment);
                    }
                }
                reply
            }
            Generation::Completion(completion) => {
                let text = completion.content().unwrap_or_default().to_string();
                write!(output, "{text}")?;
                text
            }
        };
        Ok(reply)
    }
}
