//! Connection traversal: from a source biography to the first linked person.
//!
//! A run moves through four phases:
//!
//! 1. Fetch the source page and read its infobox (no person, no run)
//! 2. Scan the source paragraphs for candidate links
//! 3. Probe candidates in document order until one is a person
//! 4. Report the connection to every listener
//!
//! Parsed documents never live across an `await`; each phase parses what it
//! needs inside a synchronous helper and hands back owned data.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};
use url::Url;

use personlink_crawler::{HtmlPage, PageFetcher, ScanOptions, extract_person_details, scan_paragraph_links};
use personlink_shared::{ParagraphLink, PersonConnection, PersonDetails, PersonLinkError, Result};

use crate::events::{EventPipeline, ListenerFailure, ListenerId, TraversalListener};

/// Result of a single traversal run.
#[derive(Debug, Clone)]
pub struct TraversalOutcome {
    /// The person the run started from.
    pub source: PersonDetails,
    /// First qualifying connection, if any candidate was a person.
    pub connection: Option<PersonConnection>,
    /// Number of candidate links found on the source page.
    pub candidates: usize,
    /// Number of candidates fetched before the run stopped.
    pub probed: usize,
    /// Listener errors raised during the run. They never abort it.
    pub listener_failures: Vec<ListenerFailure>,
    pub elapsed: Duration,
}

/// Why a chain of runs ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStop {
    /// The hop limit was reached.
    MaxHops,
    /// The last person had no qualifying connection.
    Exhausted,
    /// The next person was already visited.
    Revisit { url: String },
    /// A later hop could not start.
    Failed { url: String, message: String },
}

/// Result of [`ConnectionTraversal::follow_chain`].
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub hops: Vec<TraversalOutcome>,
    pub stop: ChainStop,
}

impl ChainOutcome {
    /// All connections found along the chain, in order.
    pub fn connections(&self) -> impl Iterator<Item = (&PersonDetails, &PersonConnection)> {
        self.hops
            .iter()
            .filter_map(|hop| hop.connection.as_ref().map(|c| (&hop.source, c)))
    }
}

/// Drives traversal runs through a [`PageFetcher`] and reports to the
/// registered listeners.
pub struct ConnectionTraversal<F> {
    fetcher: F,
    options: ScanOptions,
    events: EventPipeline,
}

impl<F: PageFetcher> ConnectionTraversal<F> {
    pub fn new(fetcher: F, options: ScanOptions) -> Self {
        Self {
            fetcher,
            options,
            events: EventPipeline::new(),
        }
    }

    pub fn add_listener(&mut self, listener: Arc<dyn TraversalListener>) -> ListenerId {
        self.events.add_listener(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.events.remove_listener(id)
    }

    /// Find the first person linked from the biography at `url`.
    ///
    /// Fails with [`PersonLinkError::PersonNotFound`] when the source page
    /// cannot be fetched or has no person infobox; no listener hears about
    /// such a run. A run where no candidate qualifies is not an error.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn run(&self, url: &Url) -> Result<TraversalOutcome> {
        let start = Instant::now();
        let mut listener_failures = Vec::new();

        // --- Phase 1: Source ---
        let body = match self.fetcher.fetch(url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "source page unavailable");
                return Err(PersonLinkError::person_not_found(url.as_str()));
            }
        };

        // --- Phase 2: Scan ---
        let Some((source, candidates)) = read_source(url, &body, &self.options) else {
            return Err(PersonLinkError::person_not_found(url.as_str()));
        };
        drop(body);

        info!(person = %source.name, candidates = candidates.len(), "source person found");
        listener_failures.extend(
            self.events
                .notify_candidate_count(url.as_str(), candidates.len())
                .await,
        );

        // --- Phase 3: Probe ---
        let mut probed = 0;
        let mut connection = None;
        for candidate in &candidates {
            let person = self.probe(candidate).await;
            probed += 1;
            listener_failures.extend(
                self.events
                    .notify_candidate_probed(candidate, person.is_some())
                    .await,
            );

            if let Some(person) = person {
                connection = Some(PersonConnection {
                    connection_person: person,
                    context: candidate.context.clone(),
                });
                break;
            }
        }

        // --- Phase 4: Report ---
        match &connection {
            Some(found) => {
                info!(
                    to = %found.connection_person.name,
                    probed,
                    "connection found"
                );
                listener_failures.extend(self.events.notify_connection_found(&source, found).await);
            }
            None => info!(probed, "no linked person found"),
        }

        Ok(TraversalOutcome {
            source,
            connection,
            candidates: candidates.len(),
            probed,
            listener_failures,
            elapsed: start.elapsed(),
        })
    }

    /// Follow connections person to person for up to `max_hops` runs.
    ///
    /// Only the first hop can fail; a later hop that cannot start ends the
    /// chain with [`ChainStop::Failed`]. The chain also ends when a person
    /// has no connection or links back to someone already visited.
    #[instrument(skip_all, fields(start = %start, max_hops = max_hops))]
    pub async fn follow_chain(&self, start: &Url, max_hops: u32) -> Result<ChainOutcome> {
        let mut hops: Vec<TraversalOutcome> = Vec::new();
        let mut visited = HashSet::from([start.to_string()]);
        let mut current = start.clone();

        for hop in 0..max_hops {
            let outcome = match self.run(&current).await {
                Ok(outcome) => outcome,
                Err(e) if hop == 0 => return Err(e),
                Err(e) => {
                    warn!(url = %current, error = %e, "chain ended early");
                    return Ok(ChainOutcome {
                        hops,
                        stop: ChainStop::Failed {
                            url: current.to_string(),
                            message: e.to_string(),
                        },
                    });
                }
            };

            let next = outcome
                .connection
                .as_ref()
                .map(|c| c.connection_person.url.clone());
            hops.push(outcome);

            let Some(next) = next else {
                return Ok(ChainOutcome {
                    hops,
                    stop: ChainStop::Exhausted,
                });
            };
            if !visited.insert(next.clone()) {
                debug!(url = %next, "already visited");
                return Ok(ChainOutcome {
                    hops,
                    stop: ChainStop::Revisit { url: next },
                });
            }
            current = Url::parse(&next)
                .map_err(|e| PersonLinkError::parse(format!("invalid person URL {next}: {e}")))?;
        }

        Ok(ChainOutcome {
            hops,
            stop: ChainStop::MaxHops,
        })
    }

    /// Fetch a candidate and read its infobox. Any failure means the
    /// candidate does not qualify.
    async fn probe(&self, candidate: &ParagraphLink) -> Option<PersonDetails> {
        let url = match Url::parse(&candidate.link) {
            Ok(url) => url,
            Err(e) => {
                debug!(link = %candidate.link, error = %e, "unparseable candidate");
                return None;
            }
        };

        match self.fetcher.fetch(&url).await {
            Ok(body) => {
                let page = HtmlPage::parse(&body);
                extract_person_details(url.as_str(), &page)
            }
            Err(e) => {
                debug!(link = %candidate.link, error = %e, "candidate unavailable");
                None
            }
        }
    }
}

/// Parse the source page once for both its person and its candidates.
fn read_source(
    url: &Url,
    body: &str,
    options: &ScanOptions,
) -> Option<(PersonDetails, Vec<ParagraphLink>)> {
    let page = HtmlPage::parse(body);
    let source = extract_person_details(url.as_str(), &page)?;
    let candidates = scan_paragraph_links(&page, options);
    Some((source, candidates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    const BASE: &str = "https://en.wikipedia.org";

    /// In-memory pages keyed by absolute URL; unknown URLs fail like a 404.
    #[derive(Default)]
    struct FakeWiki {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeWiki {
        fn with(mut self, title: &str, html: String) -> Self {
            self.pages.insert(wiki_url(title), html);
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for FakeWiki {
        async fn fetch(&self, url: &Url) -> Result<String> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| PersonLinkError::Network(format!("{url}: HTTP 404 Not Found")))
        }
    }

    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TraversalListener for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn on_candidate_count(&self, _source_url: &str, count: usize) -> Result<()> {
            self.log.lock().unwrap().push(format!("count {count}"));
            Ok(())
        }

        async fn on_candidate_probed(&self, candidate: &ParagraphLink, resolved: bool) -> Result<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("probed {} {resolved}", candidate.text));
            Ok(())
        }

        async fn on_connection_found(
            &self,
            person: &PersonDetails,
            connection: &PersonConnection,
        ) -> Result<()> {
            self.log.lock().unwrap().push(format!(
                "connection {} -> {}",
                person.name, connection.connection_person.name
            ));
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl TraversalListener for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn on_connection_found(
            &self,
            _person: &PersonDetails,
            _connection: &PersonConnection,
        ) -> Result<()> {
            Err(PersonLinkError::Storage("database is locked".into()))
        }
    }

    fn wiki_url(title: &str) -> String {
        format!("{BASE}/wiki/{title}")
    }

    fn person_page(name: &str, born: &str, paragraphs: &str) -> String {
        format!(
            r#"<html><body><div id="mw-content-text"><div class="mw-parser-output">
<table class="infobox vcard"><tr><th colspan="2">{name}</th></tr><tr><th>Born</th><td>{born}</td></tr></table>
{paragraphs}
</div></div></body></html>"#
        )
    }

    fn plain_page(paragraphs: &str) -> String {
        format!(
            r#"<html><body><div id="mw-content-text"><div class="mw-parser-output">{paragraphs}</div></div></body></html>"#
        )
    }

    fn traversal(wiki: FakeWiki) -> ConnectionTraversal<Arc<FakeWiki>> {
        ConnectionTraversal::new(
            Arc::new(wiki),
            ScanOptions::new(Url::parse(BASE).unwrap()),
        )
    }

    fn start(title: &str) -> Url {
        Url::parse(&wiki_url(title)).unwrap()
    }

    #[tokio::test]
    async fn finds_person_with_context() {
        let wiki = FakeWiki::default()
            .with(
                "Alice",
                person_page(
                    "Alice",
                    "1 January 1970",
                    r#"<p>Alice worked with <a href="/wiki/Bob_Smith">Bob Smith</a> on the project. It succeeded.</p>"#,
                ),
            )
            .with("Bob_Smith", person_page("Bob Smith", "2 February 1960", ""));

        let recorder = Arc::new(Recorder::default());
        let mut traversal = traversal(wiki);
        traversal.add_listener(recorder.clone());

        let outcome = traversal.run(&start("Alice")).await.expect("run");
        assert_eq!(outcome.source.name, "Alice");
        assert_eq!(outcome.candidates, 1);
        assert_eq!(outcome.probed, 1);

        let connection = outcome.connection.expect("connection");
        assert_eq!(connection.connection_person.name, "Bob Smith");
        assert_eq!(connection.connection_person.url, wiki_url("Bob_Smith"));
        assert_eq!(connection.connection_person.birth_date, "2 February 1960");
        assert_eq!(connection.context, "Alice worked with Bob Smith on the project.");

        assert_eq!(
            recorder.log(),
            vec![
                "count 1",
                "probed Bob Smith true",
                "connection Alice -> Bob Smith",
            ]
        );
    }

    #[tokio::test]
    async fn skips_non_person_candidates_in_order() {
        let wiki = FakeWiki::default()
            .with(
                "Alice",
                person_page(
                    "Alice",
                    "1970",
                    r#"<p>Alice visited <a href="/wiki/Paris">Paris</a> with <a href="/wiki/Yves">Yves</a>. Later she met <a href="/wiki/Zoe">Zoe</a>.</p>"#,
                ),
            )
            .with("Paris", plain_page("<p>Paris is a city.</p>"))
            .with("Yves", person_page("Yves", "1950", ""))
            .with("Zoe", person_page("Zoe", "1960", ""));

        let recorder = Arc::new(Recorder::default());
        let wiki = Arc::new(wiki);
        let mut traversal =
            ConnectionTraversal::new(wiki.clone(), ScanOptions::new(Url::parse(BASE).unwrap()));
        traversal.add_listener(recorder.clone());

        let outcome = traversal.run(&start("Alice")).await.expect("run");
        assert_eq!(outcome.candidates, 3);
        assert_eq!(outcome.probed, 2);
        assert_eq!(
            outcome.connection.expect("connection").connection_person.name,
            "Yves"
        );

        assert_eq!(
            recorder.log(),
            vec![
                "count 3",
                "probed Paris false",
                "probed Yves true",
                "connection Alice -> Yves",
            ]
        );
        // The source is fetched once; Zoe is never fetched.
        assert_eq!(
            wiki.requests(),
            vec![wiki_url("Alice"), wiki_url("Paris"), wiki_url("Yves")]
        );
    }

    #[tokio::test]
    async fn source_without_infobox_is_person_not_found() {
        let wiki = FakeWiki::default()
            .with(
                "Paris",
                plain_page(r#"<p>Home of <a href="/wiki/Yves">Yves</a>.</p>"#),
            )
            .with("Yves", person_page("Yves", "1950", ""));

        let recorder = Arc::new(Recorder::default());
        let mut traversal = traversal(wiki);
        traversal.add_listener(recorder.clone());

        let err = traversal.run(&start("Paris")).await.unwrap_err();
        assert!(err.is_person_not_found());
        assert!(recorder.log().is_empty());
    }

    #[tokio::test]
    async fn unreachable_source_is_person_not_found() {
        let traversal = traversal(FakeWiki::default());
        let err = traversal.run(&start("Missing")).await.unwrap_err();
        assert!(err.is_person_not_found());
        assert_eq!(
            err.to_string(),
            format!("person not found at {}", wiki_url("Missing"))
        );
    }

    #[tokio::test]
    async fn no_qualifying_candidate_is_not_an_error() {
        let wiki = FakeWiki::default()
            .with(
                "Alice",
                person_page(
                    "Alice",
                    "1970",
                    r#"<p>Alice left <a href="/wiki/Paris">Paris</a> for <a href="/wiki/Nowhere">Nowhere</a>.</p>"#,
                ),
            )
            .with("Paris", plain_page("<p>A city.</p>"));

        let recorder = Arc::new(Recorder::default());
        let mut traversal = traversal(wiki);
        traversal.add_listener(recorder.clone());

        let outcome = traversal.run(&start("Alice")).await.expect("run");
        assert!(outcome.connection.is_none());
        assert_eq!(outcome.candidates, 2);
        assert_eq!(outcome.probed, 2);
        assert_eq!(
            recorder.log(),
            vec!["count 2", "probed Paris false", "probed Nowhere false"]
        );
    }

    #[tokio::test]
    async fn source_without_links_reports_zero_candidates() {
        let wiki = FakeWiki::default().with(
            "Alice",
            person_page("Alice", "1970", "<p>Alice kept to herself.</p>"),
        );
        let recorder = Arc::new(Recorder::default());
        let mut traversal = traversal(wiki);
        traversal.add_listener(recorder.clone());

        let outcome = traversal.run(&start("Alice")).await.expect("run");
        assert!(outcome.connection.is_none());
        assert_eq!(outcome.probed, 0);
        assert_eq!(recorder.log(), vec!["count 0"]);
    }

    #[tokio::test]
    async fn listener_failure_is_isolated() {
        let wiki = FakeWiki::default()
            .with(
                "Alice",
                person_page(
                    "Alice",
                    "1970",
                    r#"<p>Alice met <a href="/wiki/Bob">Bob</a>.</p>"#,
                ),
            )
            .with("Bob", person_page("Bob", "1971", ""));

        let recorder = Arc::new(Recorder::default());
        let mut traversal = traversal(wiki);
        traversal.add_listener(Arc::new(Failing));
        traversal.add_listener(recorder.clone());

        let outcome = traversal.run(&start("Alice")).await.expect("run");
        assert!(outcome.connection.is_some());
        assert_eq!(outcome.listener_failures.len(), 1);
        assert_eq!(outcome.listener_failures[0].listener, "failing");
        assert!(recorder.log().contains(&"connection Alice -> Bob".to_string()));
    }

    #[tokio::test]
    async fn removed_listener_hears_nothing() {
        let wiki = FakeWiki::default().with("Alice", person_page("Alice", "1970", ""));
        let recorder = Arc::new(Recorder::default());
        let mut traversal = traversal(wiki);
        let id = traversal.add_listener(recorder.clone());
        assert!(traversal.remove_listener(id));

        traversal.run(&start("Alice")).await.expect("run");
        assert!(recorder.log().is_empty());
    }

    fn linking_page(name: &str, next: &str) -> String {
        person_page(
            name,
            "1900",
            &format!(r#"<p>{name} knew <a href="/wiki/{next}">{next}</a>.</p>"#),
        )
    }

    #[tokio::test]
    async fn chain_stops_on_revisit() {
        let wiki = FakeWiki::default()
            .with("A", linking_page("A", "B"))
            .with("B", linking_page("B", "C"))
            .with("C", linking_page("C", "A"));

        let chain = traversal(wiki)
            .follow_chain(&start("A"), 10)
            .await
            .expect("chain");
        assert_eq!(chain.hops.len(), 3);
        assert_eq!(chain.stop, ChainStop::Revisit { url: wiki_url("A") });

        let names: Vec<_> = chain
            .connections()
            .map(|(from, c)| format!("{} -> {}", from.name, c.connection_person.name))
            .collect();
        assert_eq!(names, vec!["A -> B", "B -> C", "C -> A"]);
    }

    #[tokio::test]
    async fn chain_respects_hop_limit_and_exhaustion() {
        let wiki = FakeWiki::default()
            .with("A", linking_page("A", "B"))
            .with("B", linking_page("B", "C"))
            .with("C", person_page("C", "1900", "<p>C was alone.</p>"));
        let traversal = traversal(wiki);

        let limited = traversal.follow_chain(&start("A"), 1).await.expect("chain");
        assert_eq!(limited.hops.len(), 1);
        assert_eq!(limited.stop, ChainStop::MaxHops);

        let full = traversal.follow_chain(&start("A"), 5).await.expect("chain");
        assert_eq!(full.hops.len(), 3);
        assert_eq!(full.stop, ChainStop::Exhausted);
        assert_eq!(full.connections().count(), 2);
    }

    #[tokio::test]
    async fn chain_first_hop_failure_is_an_error() {
        let traversal = traversal(FakeWiki::default());
        let err = traversal
            .follow_chain(&start("Nobody"), 3)
            .await
            .unwrap_err();
        assert!(err.is_person_not_found());
    }
}
