//! Stream server behavior over real sockets: in-order delivery to several
//! clients, disconnect isolation, and late-joiner semantics.

use std::io::{BufRead, BufReader};
use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};

use nalgebra::Point3;

use quadtrack::{format_point, StreamServer};

fn wait_for_clients(server: &StreamServer, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while server.client_count() != expected {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for {expected} client(s), have {}",
            server.client_count()
        );
        thread::sleep(Duration::from_millis(5));
    }
}

fn connect(server: &StreamServer) -> BufReader<TcpStream> {
    let stream = TcpStream::connect(server.local_addr()).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    BufReader::new(stream)
}

fn read_points(reader: &mut BufReader<TcpStream>, count: usize) -> Vec<Point3<f64>> {
    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let fields: Vec<f64> = line
            .split_whitespace()
            .map(|f| f.parse().unwrap())
            .collect();
        assert_eq!(fields.len(), 3, "torn or malformed line: {line:?}");
        points.push(Point3::new(fields[0], fields[1], fields[2]));
    }
    points
}

#[test]
fn every_client_receives_every_point_in_order() {
    let server = StreamServer::bind("127.0.0.1:0").unwrap();
    let broadcaster = server.broadcaster();

    let mut alpha = connect(&server);
    let mut beta = connect(&server);
    wait_for_clients(&server, 2);

    let sent: Vec<Point3<f64>> = (0..50)
        .map(|i| Point3::new(i as f64 * 0.5, -(i as f64), 10.0 + i as f64))
        .collect();
    let producer = {
        let sent = sent.clone();
        thread::spawn(move || {
            for point in &sent {
                broadcaster.broadcast(point);
                thread::sleep(Duration::from_millis(2));
            }
        })
    };

    let got_alpha = read_points(&mut alpha, sent.len());
    let got_beta = read_points(&mut beta, sent.len());
    producer.join().unwrap();

    // Same fusion order for every consumer, every line parses exactly.
    assert_eq!(got_alpha, sent);
    assert_eq!(got_beta, sent);

    server.shutdown();
}

#[test]
fn dropped_client_does_not_affect_the_other() {
    let server = StreamServer::bind("127.0.0.1:0").unwrap();
    let broadcaster = server.broadcaster();

    let doomed = connect(&server);
    let mut survivor = connect(&server);
    wait_for_clients(&server, 2);

    drop(doomed);

    // Keep broadcasting until the dead socket is noticed and removed.
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut sent = 0u32;
    while server.client_count() > 1 {
        assert!(Instant::now() < deadline, "dead client was never dropped");
        broadcaster.broadcast(&Point3::new(sent as f64, 0.0, 0.0));
        sent += 1;
        thread::sleep(Duration::from_millis(5));
    }

    // The survivor still gets fresh points after the removal.
    broadcaster.broadcast(&Point3::new(-1.0, -2.0, -3.0));
    let mut line = String::new();
    loop {
        line.clear();
        survivor.read_line(&mut line).unwrap();
        if line == format_point(&Point3::new(-1.0, -2.0, -3.0)) {
            break;
        }
    }

    server.shutdown();
}

#[test]
fn late_joiners_only_see_points_fused_after_connecting() {
    let server = StreamServer::bind("127.0.0.1:0").unwrap();
    let broadcaster = server.broadcaster();

    // Published before anyone is connected: lost by design.
    broadcaster.broadcast(&Point3::new(111.0, 0.0, 0.0));

    let mut late = connect(&server);
    wait_for_clients(&server, 1);
    broadcaster.broadcast(&Point3::new(7.0, 8.0, 9.0));

    let got = read_points(&mut late, 1);
    assert_eq!(got, vec![Point3::new(7.0, 8.0, 9.0)]);

    server.shutdown();
}
