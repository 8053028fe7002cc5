//! A small Northwind trading database: its configuration and a SQLite copy of its data.

use query_engine_execution::sqlite::SqliteDatabase;

use crate::deployment::helpers::get_path_from_project_root;

pub const NORTHWIND_CONFIGURATION_PATH: &str = "static/northwind";
const TABLES_FILENAME: &str = "tables.sql";

/// Number of rows in the `orders` table.
pub const ORDER_COUNT: usize = 270;

const CATEGORIES: [&str; 8] = [
    "Beverages",
    "Condiments",
    "Confections",
    "Dairy Products",
    "Grains/Cereals",
    "Meat/Poultry",
    "Produce",
    "Seafood",
];

/// `(name, country, risk)`
const SUPPLIERS: [(&str, &str, &str); 4] = [
    ("Exotic Liquids", "UK", "low"),
    ("New Orleans Cajun Delights", "USA", "medium"),
    ("Grandma Kelly Homestead", "USA", "low"),
    ("Pavlova Ltd", "Australia", "high"),
];

pub const PRODUCTS: [&str; 12] = [
    "Chai",
    "Chang",
    "Aniseed Syrup",
    "Gumbo Mix",
    "Pavlova",
    "Boysenberry Spread",
    "Dried Pears",
    "Cranberry Sauce",
    "Mishi Kobe Niku",
    "Ikura",
    "Queso Cabrales",
    "Konbu",
];

/// `(code, company, city, country)`
const CUSTOMERS: [(&str, &str, &str, &str); 20] = [
    ("ALFKI", "Alfreds Futterkiste", "Berlin", "Germany"),
    ("ANATR", "Ana Trujillo Emparedados y helados", "Mexico D.F.", "Mexico"),
    ("ANTON", "Antonio Moreno Taqueria", "Mexico D.F.", "Mexico"),
    ("AROUT", "Around the Horn", "London", "UK"),
    ("BERGS", "Berglunds snabbkop", "Lulea", "Sweden"),
    ("BLAUS", "Blauer See Delikatessen", "Mannheim", "Germany"),
    ("BLONP", "Blondel pere et fils", "Strasbourg", "France"),
    ("BOLID", "Bolido Comidas preparadas", "Madrid", "Spain"),
    ("BONAP", "Bon app", "Marseille", "France"),
    ("BOTTM", "Bottom-Dollar Markets", "Tsawassen", "Canada"),
    ("BSBEV", "B's Beverages", "London", "UK"),
    ("CACTU", "Cactus Comidas para llevar", "Buenos Aires", "Argentina"),
    ("CENTC", "Centro comercial Moctezuma", "Mexico D.F.", "Mexico"),
    ("CHOPS", "Chop-suey Chinese", "Bern", "Switzerland"),
    ("COMMI", "Comercio Mineiro", "Sao Paulo", "Brazil"),
    ("CONSH", "Consolidated Holdings", "London", "UK"),
    ("DRACD", "Drachenblut Delikatessen", "Aachen", "Germany"),
    ("DUMON", "Du monde entier", "Nantes", "France"),
    ("EASTC", "Eastern Connection", "London", "UK"),
    ("ERNSH", "Ernst Handel", "Graz", "Austria"),
];

/// `(last name, first name, title)`; everybody but Fuller reports to Fuller.
const EMPLOYEES: [(&str, &str, &str); 9] = [
    ("Davolio", "Nancy", "Sales Representative"),
    ("Fuller", "Andrew", "Vice President, Sales"),
    ("Leverling", "Janet", "Sales Representative"),
    ("Peacock", "Margaret", "Sales Representative"),
    ("Buchanan", "Steven", "Sales Manager"),
    ("Suzuki", "Michael", "Sales Representative"),
    ("King", "Robert", "Sales Representative"),
    ("Callahan", "Laura", "Inside Sales Coordinator"),
    ("Dodsworth", "Anne", "Sales Representative"),
];

/// Employees of the first orders; later orders were taken online.
const ORDER_EMPLOYEES: [i64; 11] = [3, 3, 3, 3, 4, 4, 1, 1, 8, 8, 5];

const SHIPPERS: [(&str, &str); 3] = [
    ("Speedy Express", "(503) 555-9831"),
    ("United Package", "(503) 555-3199"),
    ("Federal Shipping", "(503) 555-9931"),
];

const REGIONS: [&str; 4] = ["Eastern", "Western", "Northern", "Southern"];

/// Load the Northwind configuration from the static directory.
pub async fn configuration() -> anyhow::Result<eql_configuration::Configuration> {
    let parsed = eql_configuration::parse_configuration(get_path_from_project_root(
        NORTHWIND_CONFIGURATION_PATH,
    ))
    .await?;
    Ok(eql_configuration::make_runtime_configuration(parsed)?)
}

/// A fresh in-memory SQLite database holding the Northwind tables and rows.
pub async fn database() -> anyhow::Result<SqliteDatabase> {
    let _ = env_logger::builder().is_test(true).try_init();

    let tables = tokio::fs::read_to_string(
        get_path_from_project_root(NORTHWIND_CONFIGURATION_PATH).join(TABLES_FILENAME),
    )
    .await?;

    let database = SqliteDatabase::in_memory().await?;
    database.execute_script(&tables).await?;
    database.execute_script(&rows()).await?;
    tracing::info!(orders = ORDER_COUNT, "loaded northwind");
    Ok(database)
}

/// The order date of the order at `index`: fifty consecutive months from
/// January 2019, with the day advancing every fifty orders.
pub fn order_date(index: usize) -> String {
    let month = index % 50;
    format!(
        "{:04}-{:02}-{:02}",
        2019 + month / 12,
        month % 12 + 1,
        index / 50 + 1
    )
}

/// The product of the order at `index`. The last product is never sold.
pub fn order_product(index: usize) -> usize {
    index % (PRODUCTS.len() - 1) + 1
}

fn text(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn rows() -> String {
    let mut statements = vec![];

    for (index, name) in CATEGORIES.iter().enumerate() {
        statements.push(format!(
            "INSERT INTO categories (category_id, category_name) VALUES ({}, {})",
            index + 1,
            text(name)
        ));
    }
    for (index, (name, country, risk)) in SUPPLIERS.iter().enumerate() {
        statements.push(format!(
            "INSERT INTO suppliers VALUES ({}, {}, {}, {})",
            index + 1,
            text(name),
            text(country),
            text(risk)
        ));
    }
    for (index, name) in PRODUCTS.iter().enumerate() {
        let id = index + 1;
        let category = if id <= 9 {
            ((id - 1) % CATEGORIES.len() + 1).to_string()
        } else {
            "NULL".to_string()
        };
        let supplier = if id == 5 { 4 } else { (id - 1) % 3 + 1 };
        statements.push(format!(
            "INSERT INTO products VALUES ({id}, {}, {supplier}, {category}, {}, {})",
            text(name),
            10 + id,
            i32::from(id % 5 == 0)
        ));
    }
    for (code, company, city, country) in CUSTOMERS {
        statements.push(format!(
            "INSERT INTO customers (customer_id, company_name, city, country) VALUES ({}, {}, {}, {})",
            text(code),
            text(company),
            text(city),
            text(country)
        ));
    }
    for (index, (last, first, title)) in EMPLOYEES.iter().enumerate() {
        let id = index + 1;
        let reports_to = if id == 2 { "NULL" } else { "2" };
        statements.push(format!(
            "INSERT INTO employees VALUES ({id}, {}, {}, {}, {reports_to})",
            text(last),
            text(first),
            text(title)
        ));
    }
    for (index, (name, phone)) in SHIPPERS.iter().enumerate() {
        statements.push(format!(
            "INSERT INTO shippers VALUES ({}, {}, {})",
            index + 1,
            text(name),
            text(phone)
        ));
    }
    for index in 0..ORDER_COUNT {
        let (code, _, _, country) = CUSTOMERS[index % CUSTOMERS.len()];
        let employee = ORDER_EMPLOYEES
            .get(index)
            .map_or_else(|| "NULL".to_string(), ToString::to_string);
        statements.push(format!(
            "INSERT INTO orders VALUES ({}, {}, {employee}, {}, {}, {}, {})",
            index + 1,
            text(code),
            text(&order_date(index)),
            index % SHIPPERS.len() + 1,
            5.0 + (index % 40) as f64 * 2.5,
            text(country)
        ));
        let product = order_product(index);
        statements.push(format!(
            "INSERT INTO order_details VALUES ({}, {}, {product}, {}, {}, 0)",
            index + 1,
            index + 1,
            10 + product,
            index % 7 + 1
        ));
    }
    for (index, description) in REGIONS.iter().enumerate() {
        statements.push(format!(
            "INSERT INTO region VALUES ({}, {})",
            index + 1,
            text(description)
        ));
    }

    statements.join(";\n")
}
