use std::cell::Cell;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use pathbind_core::{Bind, BindingError, Location, Session, Source, TraversalError};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Config;
use tracing::debug;

use crate::Xml;
use crate::error::DocumentError;
use crate::walker::{Attributes, TreeWalker};

/// Reader settings applied to every traversal of an [`XmlSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlOptions {
    check_end_names: bool,
    trim_text: bool,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self { check_end_names: true, trim_text: false }
    }
}

impl XmlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject end tags whose name differs from the open element.
    pub fn check_end_names(mut self, check: bool) -> Self {
        self.check_end_names = check;
        self
    }

    /// Drop leading and trailing whitespace of text content.
    pub fn trim_text(mut self, trim: bool) -> Self {
        self.trim_text = trim;
        self
    }

    fn apply(self, config: &mut Config) {
        config.check_end_names = self.check_end_names;
        config.expand_empty_elements = true;
        config.trim_text(self.trim_text);
    }
}

/// Consumed line and byte counts of the underlying input.
#[derive(Debug, Default)]
struct Progress {
    newlines: Cell<u64>,
    offset: Cell<u64>,
}

impl Progress {
    fn advance(&self, consumed: &[u8]) {
        let newlines = consumed.iter().filter(|&&byte| byte == b'\n').count();
        self.newlines.set(self.newlines.get() + u64::try_from(newlines).unwrap_or(u64::MAX));
        self.offset.set(self.offset.get() + u64::try_from(consumed.len()).unwrap_or(u64::MAX));
    }

    fn location(&self) -> Location {
        Location::new(self.newlines.get() + 1, self.offset.get())
    }
}

/// Counts what the tokenizer consumes so errors can name the input line.
struct Tracked<R> {
    inner: R,
    progress: Rc<Progress>,
}

impl<R: Read> Read for Tracked<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.progress.advance(&buf[..read]);
        Ok(read)
    }
}

impl<R: BufRead> BufRead for Tracked<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amount: usize) {
        if amount > 0
            && let Ok(available) = self.inner.fill_buf()
        {
            self.progress.advance(&available[..amount.min(available.len())]);
        }
        self.inner.consume(amount);
    }
}

/// A single XML document traversed through the tree events of `quick_xml`.
pub struct XmlSource<R> {
    session: Arc<Session>,
    input: R,
    options: XmlOptions,
}

impl<R: BufRead> XmlSource<R> {
    pub fn from_reader(session: Arc<Session>, input: R) -> Self {
        Self { session, input, options: XmlOptions::default() }
    }

    pub fn with_options(mut self, options: XmlOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> XmlOptions {
        self.options
    }
}

impl<'a> XmlSource<&'a [u8]> {
    pub fn from_str(session: Arc<Session>, text: &'a str) -> Self {
        Self::from_reader(session, text.as_bytes())
    }
}

impl XmlSource<BufReader<File>> {
    pub fn open(session: Arc<Session>, path: impl AsRef<Path>) -> Result<Self, TraversalError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|err| TraversalError::from(BindingError::input(err)).with_path(path.display().to_string()))?;
        Ok(Self::from_reader(session, BufReader::new(file)))
    }
}

impl<R: BufRead> Source for XmlSource<R> {
    type Kind = Xml;

    fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn accept<V: Bind<Xml>>(self, visitor: &mut V) -> Result<(), TraversalError> {
        let progress = Rc::new(Progress::default());
        let mut reader = Reader::from_reader(Tracked { inner: self.input, progress: Rc::clone(&progress) });
        self.options.apply(reader.config_mut());

        let mut walker = TreeWalker::new(Arc::clone(&self.session), visitor)?;
        let locator = Rc::clone(&progress);
        walker.document_start(move || locator.location());

        let malformed = |walker: &TreeWalker<'_>, err: BindingError| {
            TraversalError::new(err).with_path(walker.path()).with_location(Some(progress.location()))
        };

        let mut buf = Vec::new();
        let mut elements = 0usize;
        loop {
            match reader.read_event_into(&mut buf).map_err(|err| malformed(&walker, BindingError::input(err)))? {
                Event::Start(start) => {
                    let name = decode(start.name().as_ref()).map_err(|err| malformed(&walker, err))?;
                    let attributes = attributes(&start).map_err(|err| malformed(&walker, err))?;
                    walker.node_enter(&name, &attributes)?;
                    elements += 1;
                }
                Event::End(end) => {
                    let name = decode(end.name().as_ref()).map_err(|err| malformed(&walker, err))?;
                    walker.node_exit(&name)?;
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        walker.document_end()?;
        debug!(elements, lines = progress.location().line, "xml traversal finished");
        Ok(())
    }
}

fn decode(raw: &[u8]) -> Result<String, BindingError> {
    std::str::from_utf8(raw).map(str::to_owned).map_err(|err| BindingError::input(DocumentError::Name(err)))
}

fn attributes(start: &BytesStart<'_>) -> Result<Attributes, BindingError> {
    let mut attributes = Attributes::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(BindingError::input)?;
        let name = decode(attribute.key.as_ref())?;
        let value = attribute.unescape_value().map_err(BindingError::input)?;
        attributes.push(name, value);
    }
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn progress_counts_lines_of_consumed_input() {
        let progress = Rc::new(Progress::default());
        let mut tracked = Tracked { inner: "a\nb\nc".as_bytes(), progress: Rc::clone(&progress) };
        let mut line = String::new();
        tracked.read_line(&mut line).expect("reads");
        assert_eq!(progress.location(), Location::new(2, 2));
        tracked.read_line(&mut line).expect("reads");
        assert_eq!(progress.location(), Location::new(3, 4));
    }

    #[rstest]
    fn options_default_to_checked_untrimmed() {
        let options = XmlOptions::new();
        assert_eq!(options, XmlOptions { check_end_names: true, trim_text: false });
        assert!(!options.check_end_names(false).check_end_names);
    }

    #[rstest]
    fn sources_keep_their_options() {
        let source = XmlSource::from_str(Arc::new(Session::new()), "<a/>");
        assert_eq!(source.options(), XmlOptions::default());
        let source = source.with_options(XmlOptions::new().trim_text(true));
        assert!(source.options().trim_text);
        assert!(source.options().check_end_names);
    }
}
