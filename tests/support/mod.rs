#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::json;
use tiny_http::{Header, Response, Server};

/// What a handler sees of one request.
#[derive(Debug, Clone)]
pub struct Hit {
    pub path: String,
    pub page: u32,
    pub per_page: u32,
    /// How many times page 1 has been requested, this one included.
    pub first_page_reads: usize,
}

/// Local stand-in for the comment API.
pub struct FakeApi {
    base_url: String,
    hits: Arc<Mutex<Vec<Hit>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FakeApi {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&Hit) -> (u16, String) + Send + 'static,
    {
        let server = Server::http("127.0.0.1:0").expect("bind fake api");
        let addr = server
            .server_addr()
            .to_ip()
            .expect("fake api listens on tcp");
        let base_url = format!("http://{addr}/");
        let hits = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let hits = hits.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    let request = match server.recv_timeout(Duration::from_millis(20)) {
                        Ok(Some(request)) => request,
                        Ok(None) => continue,
                        Err(_) => break,
                    };
                    let url = url::Url::parse(&format!("http://fake{}", request.url()))
                        .expect("request url");
                    let query = |key: &str| {
                        url.query_pairs()
                            .find(|(k, _)| k == key)
                            .and_then(|(_, v)| v.parse::<u32>().ok())
                            .unwrap_or(0)
                    };
                    let hit = {
                        let mut hits = hits.lock().unwrap();
                        let page = query("page");
                        let earlier_reads = hits.iter().filter(|h: &&Hit| h.page == 1).count();
                        let first_page_reads = earlier_reads + usize::from(page == 1);
                        let hit = Hit {
                            path: url.path().to_string(),
                            page,
                            per_page: query("perPage"),
                            first_page_reads,
                        };
                        hits.push(hit.clone());
                        hit
                    };
                    let (status, body) = handler(&hit);
                    let header =
                        Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                            .expect("content type header");
                    let response = Response::from_string(body)
                        .with_status_code(status)
                        .with_header(header);
                    let _ = request.respond(response);
                }
            })
        };

        Self {
            base_url,
            hits,
            stop,
            handle: Some(handle),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn pages(&self) -> Vec<u32> {
        self.hits().into_iter().map(|hit| hit.page).collect()
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Two comments per page: ids `page*1000` and `page*1000+1`.
pub fn page_body(page: u32, last_page: u32, likes: impl Fn(u64) -> u64) -> String {
    let data: Vec<_> = (0..2u64)
        .map(|k| {
            let id = u64::from(page) * 1000 + k;
            json!({
                "pCommentNo": id,
                "userId": format!("user{id}"),
                "userNick": format!("nick{id}"),
                "likeCnt": likes(id),
                "regDate": "2024-05-01 12:00:00",
                "profileImage": "//profile.img.sooplive.co.kr/LOGO/x.jpg",
                "isBestTop": false,
            })
        })
        .collect();
    json!({
        "data": data,
        "meta": {
            "total": u64::from(last_page) * 2,
            "perPage": 30,
            "lastPage": last_page,
            "currentPage": page,
        }
    })
    .to_string()
}
