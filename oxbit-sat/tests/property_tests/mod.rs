mod cdcl_properties;
