pub const SCHEMA: &str = r#"
-- Clients: owned by the record store; this service reads the name and
-- writes the profile picture path.
CREATE TABLE IF NOT EXISTS clients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name TEXT NOT NULL,
    profile_picture TEXT
);

-- Appointments: owned by the record store; this service reads date/type
-- and flips photos_taken.
CREATE TABLE IF NOT EXISTS appointments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id INTEGER NOT NULL,
    date DATE NOT NULL,
    type TEXT NOT NULL,
    photos_taken TEXT DEFAULT 'No',
    FOREIGN KEY (client_id) REFERENCES clients (id) ON DELETE CASCADE
);

-- Photos: created only by successful ingestion. appt_date and type are
-- denormalized copies kept in sync by the record synchronizer.
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_id INTEGER NOT NULL,
    appointment_id INTEGER NOT NULL,
    appt_date DATE,
    file_path TEXT NOT NULL,
    type TEXT,
    description TEXT DEFAULT '',
    FOREIGN KEY (client_id) REFERENCES clients (id) ON DELETE CASCADE,
    FOREIGN KEY (appointment_id) REFERENCES appointments (id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_appointments_client ON appointments(client_id);
CREATE INDEX IF NOT EXISTS idx_photos_appointment ON photos(appointment_id);
CREATE INDEX IF NOT EXISTS idx_photos_client ON photos(client_id);
"#;
